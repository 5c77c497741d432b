//! SDK-backed adapter implementations.
//!
//! Handlers are synchronous; each call bridges into the async SDK with
//! `block_in_place`, so binaries must run on the multi-threaded runtime.

use std::future::Future;

use aws_sdk_lambda::types::InvocationType;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use crate::adapters::invoke::FunctionInvoker;
use crate::adapters::notify::{EmailSender, SmsSender};
use crate::adapters::object_store::ObjectStore;
use crate::adapters::workflow::WorkflowStarter;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

#[derive(Clone)]
pub struct LambdaFunctionInvoker {
    pub client: aws_sdk_lambda::Client,
}

impl FunctionInvoker for LambdaFunctionInvoker {
    fn invoke_async(&self, function_name: &str, payload: &[u8]) -> Result<(), String> {
        let request = self
            .client
            .invoke()
            .function_name(function_name)
            .invocation_type(InvocationType::Event)
            .set_payload(Some(payload.to_vec().into()));

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to invoke lambda: {error}"))
        })
    }
}

#[derive(Clone)]
pub struct StepFunctionsStarter {
    pub client: aws_sdk_sfn::Client,
}

impl WorkflowStarter for StepFunctionsStarter {
    fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String, String> {
        let request = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .input(input);

        block_on(async move {
            request
                .send()
                .await
                .map(|output| output.execution_arn().to_string())
                .map_err(|error| format!("failed to start execution: {error}"))
        })
    }
}

#[derive(Clone)]
pub struct SnsSmsSender {
    pub client: aws_sdk_sns::Client,
}

impl SmsSender for SnsSmsSender {
    fn send_sms(&self, phone_number: &str, message: &str) -> Result<(), String> {
        let request = self
            .client
            .publish()
            .phone_number(phone_number)
            .message(message);

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to publish sms: {error}"))
        })
    }
}

#[derive(Clone)]
pub struct SesEmailSender {
    pub client: aws_sdk_sesv2::Client,
}

impl EmailSender for SesEmailSender {
    fn send_email(&self, source: &str, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let subject = Content::builder()
            .data(subject)
            .build()
            .map_err(|error| format!("invalid email subject: {error}"))?;
        let text = Content::builder()
            .data(body)
            .build()
            .map_err(|error| format!("invalid email body: {error}"))?;
        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().text(text).build())
            .build();

        let request = self
            .client
            .send_email()
            .from_email_address(source)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build());

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to send email: {error}"))
        })
    }
}

#[derive(Clone)]
pub struct S3ObjectStore {
    pub client: aws_sdk_s3::Client,
}

impl ObjectStore for S3ObjectStore {
    fn write_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String> {
        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body.to_vec()));

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to write object to s3: {error}"))
        })
    }

    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let request = self.client.get_object().bucket(bucket).key(key);

        block_on(async move {
            let output = request
                .send()
                .await
                .map_err(|error| format!("failed to read object from s3: {error}"))?;
            output
                .body
                .collect()
                .await
                .map(|bytes| bytes.into_bytes().to_vec())
                .map_err(|error| format!("failed to read object body: {error}"))
        })
    }

    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, String> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        block_on(async move {
            let mut keys = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page.map_err(|error| format!("failed to list s3 objects: {error}"))?;
                keys.extend(
                    page.contents()
                        .iter()
                        .filter_map(|object| object.key().map(str::to_string)),
                );
            }
            Ok(keys)
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String> {
        let request = self.client.delete_object().bucket(bucket).key(key);

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to delete object from s3: {error}"))
        })
    }
}
