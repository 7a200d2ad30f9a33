use anyhow::{bail, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::json;
use tracing::warn;

use crate::fetch::{DELIVERY_TIMEOUT, FETCH_TIMEOUT};

/// Images at or below this size are treated as placeholders or corrupt
/// payloads and not attached.
const MIN_PHOTO_BYTES: usize = 5000;

/// How a post ultimately went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivered {
    Photo,
    Text,
}

pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
    chat_id: String,
    parse_mode: Option<&'static str>,
}

impl TelegramClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: &str,
        chat_id: String,
        parse_mode: Option<&'static str>,
    ) -> Self {
        let api_url = format!("{}/bot{token}", base_url.trim_end_matches('/'));

        Self {
            client,
            api_url,
            chat_id,
            parse_mode,
        }
    }

    /// Delivers a post, attaching the image when it is fetchable and big
    /// enough to be real. Any failure on the photo path falls back to a
    /// plain text message; only a failed text send is an error.
    pub async fn send(&self, text: &str, image: Option<&Url>) -> Result<Delivered> {
        if let Some(image) = image {
            match self.try_send_photo(text, image).await {
                Ok(()) => return Ok(Delivered::Photo),

                Err(e) => {
                    warn!("Could not deliver with the image `{image}`, falling back to text: {e:#}");
                }
            }
        }

        self.send_text(text).await?;

        Ok(Delivered::Text)
    }

    async fn try_send_photo(&self, caption: &str, image: &Url) -> Result<()> {
        let response = self
            .client
            .get(image.clone())
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .context("could not fetch the image")?
            .error_for_status()
            .context("the image server returned an error")?;
        let bytes = response.bytes().await.context("could not read the image")?;

        if bytes.len() <= MIN_PHOTO_BYTES {
            bail!("the image is only {} bytes, likely a placeholder", bytes.len());
        }

        let photo = Part::bytes(bytes.to_vec())
            .file_name("gaming.jpg")
            .mime_str("image/jpeg")
            .context("could not build the photo part")?;
        let mut form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", photo);

        if let Some(parse_mode) = self.parse_mode {
            form = form.text("parse_mode", parse_mode);
        }

        let response = self
            .client
            .post(format!("{}/sendPhoto", self.api_url))
            .timeout(DELIVERY_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .context("could not reach the Telegram API")?;

        if !response.status().is_success() {
            bail!("sendPhoto failed with status {}", response.status());
        }

        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        if let Some(parse_mode) = self.parse_mode {
            payload["parse_mode"] = json!(parse_mode);
        }

        let response = self
            .client
            .post(format!("{}/sendMessage", self.api_url))
            .timeout(DELIVERY_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .context("could not reach the Telegram API")?;

        if !response.status().is_success() {
            bail!("sendMessage failed with status {}", response.status());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{Delivered, TelegramClient};

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::new(
            reqwest::Client::new(),
            &server.uri(),
            "TOKEN",
            "@channel".into(),
            Some("HTML"),
        )
    }

    #[tokio::test]
    async fn big_image_goes_out_as_a_photo() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10_000]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendPhoto"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let image = Url::parse(&format!("{}/image.jpg", server.uri())).unwrap();
        let delivered = client(&server).send("post", Some(&image)).await.unwrap();

        assert_eq!(delivered, Delivered::Photo);
    }

    #[tokio::test]
    async fn small_image_falls_back_to_text() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 400]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendPhoto"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let image = Url::parse(&format!("{}/image.jpg", server.uri())).unwrap();
        let delivered = client(&server).send("post", Some(&image)).await.unwrap();

        assert_eq!(delivered, Delivered::Text);
    }

    #[tokio::test]
    async fn failed_text_send_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        assert!(client(&server).send("post", None).await.is_err());
    }
}
