//! In-process S3 endpoint for exercising the object storage store
//!
//! Path-style requests only. Answers the calls the store makes: HeadBucket,
//! HeadObject, GetObject, PutObject, DeleteObject and ListObjectsV2. Auth
//! headers are ignored. Error bodies carry the codes a real service sends.

#![allow(dead_code)]

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

type Buckets = Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>;

pub struct FakeS3 {
    pub addr: SocketAddr,
    buckets: Buckets,
    server: JoinHandle<()>,
}

impl FakeS3 {
    /// Serve on an ephemeral localhost port with the given buckets created
    pub async fn start(buckets: &[&str]) -> Self {
        let buckets: Buckets = Arc::new(Mutex::new(
            buckets
                .iter()
                .map(|name| (name.to_string(), BTreeMap::new()))
                .collect(),
        ));

        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&buckets));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            buckets,
            server,
        }
    }

    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Keys currently stored in `bucket`, in order
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Drop for FakeS3 {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(buckets): State<Buckets>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches('/');
    let (bucket, key) = match path.split_once('/') {
        Some((bucket, key)) => (bucket.to_string(), key.to_string()),
        None => (path.to_string(), String::new()),
    };

    let mut buckets = buckets.lock().unwrap();
    let Some(objects) = buckets.get_mut(&bucket) else {
        if method == Method::HEAD {
            return StatusCode::NOT_FOUND.into_response();
        }
        return error(StatusCode::NOT_FOUND, "NoSuchBucket", &bucket);
    };

    if key.is_empty() {
        if method == Method::HEAD {
            return StatusCode::OK.into_response();
        }
        if method == Method::GET && query.get("list-type").map(String::as_str) == Some("2") {
            let prefix = query.get("prefix").cloned().unwrap_or_default();
            return list_objects(&bucket, &prefix, objects);
        }
        return error(StatusCode::NOT_IMPLEMENTED, "NotImplemented", &bucket);
    }

    if method == Method::HEAD {
        if objects.contains_key(&key) {
            StatusCode::OK.into_response()
        } else {
            StatusCode::NOT_FOUND.into_response()
        }
    } else if method == Method::GET {
        match objects.get(&key) {
            Some(data) => data.clone().into_response(),
            None => error(StatusCode::NOT_FOUND, "NoSuchKey", &key),
        }
    } else if method == Method::PUT {
        objects.insert(key, body.to_vec());
        StatusCode::OK.into_response()
    } else if method == Method::DELETE {
        objects.remove(&key);
        StatusCode::NO_CONTENT.into_response()
    } else {
        error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed", &key)
    }
}

fn list_objects(bucket: &str, prefix: &str, objects: &BTreeMap<String, Vec<u8>>) -> Response {
    let contents: Vec<String> = objects
        .iter()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, data)| {
            format!(
                "<Contents><Key>{}</Key><Size>{}</Size></Contents>",
                key,
                data.len()
            )
        })
        .collect();

    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
         <Name>{}</Name><Prefix>{}</Prefix><KeyCount>{}</KeyCount>\
         <MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated>{}</ListBucketResult>",
        bucket,
        prefix,
        contents.len(),
        contents.concat()
    );
    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}

fn error(status: StatusCode, code: &str, resource: &str) -> Response {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Error><Code>{}</Code><Message>{}</Message><Resource>{}</Resource></Error>",
        code, code, resource
    );
    (status, [(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}
