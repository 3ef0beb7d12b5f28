//! Avro binary encoding of [`SendEmailCommand`], shared by producer and consumer.
//!
//! Records are single datums written against [`SEND_EMAIL_SCHEMA`] with no
//! container header. The command's serde names are the schema's field names.

use crate::domain::model::SendEmailCommand;
use crate::utils::error::{LoanError, Result};
use apache_avro::{from_avro_datum, from_value, to_avro_datum, to_value, Schema};

pub const SEND_EMAIL_SCHEMA: &str = r#"{
  "type": "record",
  "name": "SendEmailCommand",
  "namespace": "library.commands",
  "fields": [
    {"name": "toAddress", "type": "string"},
    {"name": "subject", "type": "string"},
    {"name": "body", "type": "string"}
  ]
}"#;

pub fn send_email_schema() -> Result<Schema> {
    Schema::parse_str(SEND_EMAIL_SCHEMA).map_err(|e| codec_error("invalid schema", e))
}

pub fn encode_send_email(command: &SendEmailCommand) -> Result<Vec<u8>> {
    let schema = send_email_schema()?;
    let value = to_value(command).map_err(|e| codec_error("encode", e))?;
    to_avro_datum(&schema, value).map_err(|e| codec_error("encode", e))
}

pub fn decode_send_email(bytes: &[u8]) -> Result<SendEmailCommand> {
    let schema = send_email_schema()?;
    let mut reader = bytes;
    let value =
        from_avro_datum(&schema, &mut reader, None).map_err(|e| codec_error("decode", e))?;
    if !reader.is_empty() {
        return Err(LoanError::Codec {
            message: format!("{} trailing bytes after record", reader.len()),
        });
    }
    from_value::<SendEmailCommand>(&value).map_err(|e| codec_error("decode", e))
}

fn codec_error(stage: &str, e: apache_avro::Error) -> LoanError {
    LoanError::Codec {
        message: format!("{} failed: {}", stage, e),
    }
}
