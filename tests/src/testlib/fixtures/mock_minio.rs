//! A mocked MinIO S3 API.
//!
//! Answers the two requests the result fetcher makes against an S3-compatible store:
//! `ListObjectsV2` on the request bucket and `GetObject` for each listed key, both
//! path-style (`/{bucket}/{key}`).

use anyhow::{Context as _, Result};
use mockito::{Matcher, Mock, Server, ServerGuard};
use servicex_client::results::ResultFetcher;
use servicex_object_store::url::ObjectStoreUrl;

use super::minio_credentials;

const LAST_MODIFIED: &str = "Wed, 17 Jun 2020 12:00:00 GMT";

pub struct MockMinio {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl MockMinio {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
            mocks: Vec::new(),
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    /// A fetcher reading from this mock.
    pub fn fetcher(&self) -> Result<ResultFetcher> {
        let url = ObjectStoreUrl::new(self.url()).context("mock MinIO URL")?;
        Ok(ResultFetcher::new(url, minio_credentials()))
    }

    /// List `objects` (key and size) as the contents of `bucket`.
    pub async fn list_bucket(&mut self, bucket: &str, objects: &[(&str, usize)]) -> &mut Self {
        let contents: String = objects
            .iter()
            .map(|(key, size)| {
                format!(
                    "<Contents><Key>{key}</Key><LastModified>2020-06-17T12:00:00.000Z</LastModified>\
                     <ETag>\"{etag}\"</ETag><Size>{size}</Size><StorageClass>STANDARD</StorageClass></Contents>",
                    etag = etag(key),
                )
            })
            .collect();
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>{bucket}</Name><Prefix></Prefix><KeyCount>{count}</KeyCount><MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated>{contents}</ListBucketResult>"#,
            count = objects.len(),
        );

        let mock = self
            .server
            .mock("GET", Matcher::Regex(format!(r"^/{bucket}(\?.*)?$")))
            .match_query(Matcher::UrlEncoded("list-type".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Serve `contents` for `key` in `bucket`.
    pub async fn serve_object(&mut self, bucket: &str, key: &str, contents: Vec<u8>) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/{bucket}/{key}").as_str())
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_header("last-modified", LAST_MODIFIED)
            .with_header("etag", &format!("\"{}\"", etag(key)))
            .with_body(contents)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Answer requests for `key` in `bucket` with `NoSuchKey`.
    pub async fn missing_object(&mut self, bucket: &str, key: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/{bucket}/{key}").as_str())
            .with_status(404)
            .with_header("content-type", "application/xml")
            .with_body(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>"#,
            )
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }
}

fn etag(key: &str) -> String {
    format!("{:016x}", key.bytes().fold(0u64, |acc, b| acc.rotate_left(5) ^ u64::from(b)))
}
