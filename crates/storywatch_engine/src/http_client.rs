use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storywatch_core::{StoryId, UserId};
use storywatch_logging::{watch_debug, watch_info};

use crate::client::{ClientError, FailureKind, RawStory, StoryClient};
use crate::persist::AtomicFileWriter;

const SET_AUTHORIZATION: &str = "ig-set-authorization";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Base of the private API, e.g. `https://i.instagram.com/api/v1/`.
    pub api_base: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_media_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: "https://i.instagram.com/api/v1/".to_string(),
            user_agent: "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_media_bytes: 100 * 1024 * 1024,
        }
    }
}

/// What gets written to the session file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SessionMaterial {
    #[serde(default)]
    authorization: Option<String>,
    #[serde(default)]
    device_id: String,
}

/// [`StoryClient`] over the platform's JSON API.
pub struct HttpStoryClient {
    settings: ClientSettings,
    base: Url,
    http: reqwest::Client,
    session: Mutex<SessionMaterial>,
}

impl HttpStoryClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let mut base_str = settings.api_base.clone();
        if !base_str.ends_with('/') {
            base_str.push('/');
        }
        let base = Url::parse(&base_str).map_err(|err| {
            ClientError::new(FailureKind::UnexpectedResponse, format!("invalid api base: {err}"))
        })?;
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClientError::new(FailureKind::Network, err.to_string()))?;
        let session = SessionMaterial {
            authorization: None,
            device_id: format!("android-{:016x}", rand::random::<u64>()),
        };
        Ok(Self {
            settings,
            base,
            http,
            session: Mutex::new(session),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(|err| {
            ClientError::new(FailureKind::UnexpectedResponse, format!("bad endpoint {path}: {err}"))
        })
    }

    fn session(&self) -> std::sync::MutexGuard<'_, SessionMaterial> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(USER_AGENT, self.settings.user_agent.as_str());
        if let Some(auth) = self.session().authorization.clone() {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ClientError::new(FailureKind::Auth, status.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }

    async fn get_json(&self, url: Url) -> Result<Value, ClientError> {
        let response = self.send(self.request(Method::GET, url)).await?;
        response.json::<Value>().await.map_err(|err| {
            ClientError::new(FailureKind::UnexpectedResponse, err.to_string())
        })
    }

    async fn download_bytes(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        let max_bytes = self.settings.max_media_bytes;
        let response = self
            .send(
                self.http
                    .get(url)
                    .header(USER_AGENT, self.settings.user_agent.as_str()),
            )
            .await?;
        if let Some(len) = response.content_length() {
            if len > max_bytes {
                return Err(ClientError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(len),
                    },
                    "media too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ClientError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "media too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl StoryClient for HttpStoryClient {
    async fn restore_session(&self, material: &[u8]) -> Result<(), ClientError> {
        let restored: SessionMaterial = serde_json::from_slice(material).map_err(|err| {
            ClientError::new(FailureKind::UnexpectedResponse, format!("bad session: {err}"))
        })?;
        if restored.authorization.is_none() {
            return Err(ClientError::new(FailureKind::Auth, "session has no authorization"));
        }
        *self.session() = restored;
        Ok(())
    }

    async fn verify_session(&self) -> Result<(), ClientError> {
        if self.session().authorization.is_none() {
            return Err(ClientError::new(FailureKind::Auth, "no session"));
        }
        let url = self.endpoint("accounts/current_user/?edit=true")?;
        self.send(self.request(Method::GET, url)).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let url = self.endpoint("accounts/login/")?;
        // A fresh login never carries a token from an earlier or restored session.
        let device_id = {
            let mut session = self.session();
            session.authorization = None;
            session.device_id.clone()
        };
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("enc_password", &format!("#PWD_INSTAGRAM:0:0:{password}"))
            .append_pair("device_id", &device_id)
            .append_pair("login_attempt_count", "0")
            .finish();
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/x-www-form-urlencoded"),
                    )
                    .body(body),
            )
            .await?;

        let authorization = response
            .headers()
            .get(SET_AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| ClientError::new(FailureKind::Auth, "login returned no authorization"))?;
        self.session().authorization = Some(authorization);
        watch_info!("Logged in as {}", username);
        Ok(())
    }

    fn export_session(&self) -> Result<Vec<u8>, ClientError> {
        serde_json::to_vec_pretty(&*self.session())
            .map_err(|err| ClientError::new(FailureKind::Io, err.to_string()))
    }

    async fn user_id(&self, account: &str) -> Result<String, ClientError> {
        let mut url = self.endpoint("users/web_profile_info/")?;
        url.query_pairs_mut().append_pair("username", account);
        let body = self.get_json(url).await?;
        match body.pointer("/data/user/id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ClientError::new(
                FailureKind::UnexpectedResponse,
                format!("no user id for {account}"),
            )),
        }
    }

    async fn list_stories(&self, user_id: UserId) -> Result<Vec<RawStory>, ClientError> {
        let mut url = self.endpoint("feed/reels_media/")?;
        url.query_pairs_mut()
            .append_pair("reel_ids", &user_id.to_string());
        let body = self.get_json(url).await?;
        let Some(items) = body
            .get("reels")
            .and_then(|reels| reels.get(user_id.to_string()))
            .and_then(|reel| reel.get("items"))
        else {
            return Ok(Vec::new());
        };
        serde_json::from_value(items.clone())
            .map_err(|err| ClientError::new(FailureKind::UnexpectedResponse, err.to_string()))
    }

    async fn download_story(&self, story_id: StoryId, dir: &Path) -> Result<PathBuf, ClientError> {
        let url = self.endpoint(&format!("media/{story_id}/info/"))?;
        let info = self.get_json(url).await?;
        let item = info
            .pointer("/items/0")
            .ok_or_else(|| ClientError::new(FailureKind::UnexpectedResponse, "no media item"))?;
        let (media_url, extension) = media_location(item).ok_or_else(|| {
            ClientError::new(FailureKind::UnexpectedResponse, "no media url")
        })?;
        let media_url = Url::parse(&media_url)
            .map_err(|err| ClientError::new(FailureKind::UnexpectedResponse, err.to_string()))?;

        watch_debug!("Downloading story {} from {}", story_id, media_url);
        let bytes = self.download_bytes(media_url).await?;
        AtomicFileWriter::new(dir.to_path_buf())
            .write(&format!("{story_id}.{extension}"), bytes)
            .map_err(|err| ClientError::new(FailureKind::Io, err.to_string()))
    }
}

/// Best media url of an item plus the file extension it should be stored with.
fn media_location(item: &Value) -> Option<(String, &'static str)> {
    if let Some(url) = item.pointer("/video_versions/0/url").and_then(Value::as_str) {
        return Some((url.to_string(), "mp4"));
    }
    item.pointer("/image_versions2/candidates/0/url")
        .and_then(Value::as_str)
        .map(|url| (url.to_string(), "jpg"))
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::new(FailureKind::Timeout, err.to_string());
    }
    ClientError::new(FailureKind::Network, err.to_string())
}
