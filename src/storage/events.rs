//! S3 event notifications delivered to the document upload queue.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct S3Event {
    // Absent on the `s3:TestEvent` sent when the notification is configured
    #[serde(rename = "Records", default)]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    #[serde(default)]
    size: Option<i64>,
}

/// An object that finished uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub size: Option<i64>,
}

/// Objects named in an S3 event notification body.
pub fn parse_uploaded_objects(body: &str) -> Result<Vec<UploadedObject>, serde_json::Error> {
    let event: S3Event = serde_json::from_str(body)?;

    Ok(event
        .records
        .into_iter()
        .map(|record| UploadedObject {
            key: record.s3.object.key,
            size: record.s3.object.size,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_key_and_size() {
        let body = r#"{
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "documents" },
                    "object": { "key": "bus-1/doc-2", "size": 2048, "eTag": "abc" }
                }
            }]
        }"#;

        assert_eq!(
            parse_uploaded_objects(body).unwrap(),
            vec![UploadedObject {
                key: "bus-1/doc-2".to_string(),
                size: Some(2048),
            }]
        );
    }

    #[test]
    fn test_event_has_no_objects() {
        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Bucket":"documents"}"#;
        assert!(parse_uploaded_objects(body).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_uploaded_objects("not json").is_err());
    }
}
