pub trait ObjectStore {
    fn write_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String>;

    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;

    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, String>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String>;
}
