pub trait SmsSender {
    fn send_sms(&self, phone_number: &str, message: &str) -> Result<(), String>;
}

pub trait EmailSender {
    fn send_email(&self, source: &str, to: &str, subject: &str, body: &str)
        -> Result<(), String>;
}
