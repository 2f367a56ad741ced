//! Object storage state store
//!
//! Stores one JSON object per cluster at `<prefix>/<name>/cluster.json` in an
//! S3-compatible bucket. Consistency is whatever the provider offers; callers
//! should assume eventual read-after-write.
//!
//! A missing bucket is an error on every operation, never an absent cluster.
//! HEAD responses carry no error code, so `exists` asks for the bucket when
//! the object HEAD comes back 404; that needs `s3:ListBucket`.

use crate::cluster::{ClusterDefinition, Encoding};
use crate::error::{Result, StateError};
use crate::store::{Backend, S3Options, StateStore};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Component, Path};

/// Region sent to S3-compatible endpoints that ignore it
const DEFAULT_REGION: &str = "us-east-1";
const CREDENTIALS_SOURCE: &str = "kubicorn";

/// S3-compatible object storage store
pub struct S3Store {
    client: Client,
    bucket: String,
    key_prefix: String,
    cluster_name: String,
    encoding: Encoding,
}

impl S3Store {
    /// Build a client for the configured endpoint
    ///
    /// An empty endpoint or bucket is rejected here. No request is made.
    pub fn new(
        options: &S3Options,
        prefix: impl AsRef<Path>,
        cluster_name: impl Into<String>,
    ) -> Result<Self> {
        if options.endpoint.trim().is_empty() {
            return Err(StateError::InvalidArgument(
                "Empty s3 endpoint. Must specify the endpoint url of the object storage".to_string(),
            ));
        }
        if options.bucket.trim().is_empty() {
            return Err(StateError::InvalidArgument(
                "Empty s3 bucket. Must specify the bucket name for the state store".to_string(),
            ));
        }

        let credentials = Credentials::new(
            options.access_key.clone(),
            options.secret_key.clone(),
            None,
            None,
            CREDENTIALS_SOURCE,
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(endpoint_url(&options.endpoint, options.ssl))
            .region(Region::new(DEFAULT_REGION))
            .credentials_provider(credentials)
            .force_path_style(true)
            // Many S3-compatible servers reject the newer default checksums
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        Ok(Self {
            client: Client::from_conf(config),
            bucket: options.bucket.clone(),
            key_prefix: key_prefix(prefix.as_ref()),
            cluster_name: cluster_name.into(),
            encoding: Encoding::Json,
        })
    }

    /// Object key of this cluster's snapshot
    pub fn object_key(&self) -> String {
        let object = format!("{}/{}", self.cluster_name, self.encoding.file_name());
        if self.key_prefix.is_empty() {
            object
        } else {
            format!("{}/{}", self.key_prefix, object)
        }
    }

    fn list_prefix(&self) -> String {
        if self.key_prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.key_prefix)
        }
    }

    fn storage_error<E>(&self, op: &str, err: SdkError<E, HttpResponse>) -> StateError
    where
        E: std::error::Error + 'static,
    {
        StateError::ObjectStorage(format!(
            "{} s3://{}/{}: {}",
            op,
            self.bucket,
            self.object_key(),
            DisplayErrorContext(&err)
        ))
    }

    async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(StateError::ObjectStorage(format!(
                "bucket [{}] does not exist",
                self.bucket
            ))),
            Err(e) => Err(self.storage_error("HeadBucket", e)),
        }
    }
}

/// Apply the scheme implied by `ssl` unless the endpoint already carries one
fn endpoint_url(endpoint: &str, ssl: bool) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if ssl {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

/// Turn a store path into a key prefix: only normal components survive
fn key_prefix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// 404 on a HEAD request, where there is no body to tell key from bucket
fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool {
    err.raw_response()
        .map(|response| response.status().as_u16() == 404)
        .unwrap_or(false)
}

#[async_trait]
impl StateStore for S3Store {
    fn backend(&self) -> Backend {
        Backend::S3
    }

    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    async fn exists(&self) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => {
                self.ensure_bucket().await?;
                Ok(false)
            }
            Err(e) => Err(self.storage_error("HeadObject", e)),
        }
    }

    async fn get_cluster(&self) -> Result<ClusterDefinition> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.object_key())
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(GetObjectError::is_no_such_key) => {
                return Err(StateError::NotFound {
                    cluster: self.cluster_name.clone(),
                });
            }
            Err(e) => return Err(self.storage_error("GetObject", e)),
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StateError::ObjectStorage(format!("reading object body: {}", e)))?
            .into_bytes();

        self.encoding.decode(&self.cluster_name, &bytes)
    }

    async fn commit(&self, cluster: &ClusterDefinition) -> Result<()> {
        if cluster.name != self.cluster_name {
            return Err(StateError::InvalidArgument(format!(
                "store is bound to cluster [{}] but was given [{}]",
                self.cluster_name, cluster.name
            )));
        }

        let bytes = self.encoding.encode(cluster)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key())
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| self.storage_error("PutObject", e))?;

        tracing::debug!("Uploaded cluster [{}] to s3://{}", self.cluster_name, self.bucket);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        // DeleteObject succeeds for keys that are already gone
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key())
            .send()
            .await
            .map_err(|e| self.storage_error("DeleteObject", e))?;

        tracing::debug!("Deleted cluster [{}] from s3://{}", self.cluster_name, self.bucket);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let prefix = self.list_prefix();
        let suffix = format!("/{}", self.encoding.file_name());
        let mut names = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| self.storage_error("ListObjectsV2", e))?;

            for object in response.contents() {
                let Some(key) = object.key() else { continue };
                let Some(rest) = key.strip_prefix(&prefix) else { continue };
                if let Some(name) = rest.strip_suffix(&suffix) {
                    if !name.is_empty() && !name.contains('/') {
                        names.push(name.to_string());
                    }
                }
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        names.sort();
        Ok(names)
    }
}
