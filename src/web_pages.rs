use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::info;

use crate::email::EmailDispatcher;
use crate::error::json_error;
use crate::generation::{PosterGenerator, SourceImage};
use crate::persistence::CardStore;
use crate::studio::CardStudio;
use crate::transport::MAX_BODY_BYTES;

const STUDIO_HTML: &str = include_str!("../templates/studio.html");

pub const GENERATE_PATH: &str = "/api/generate";

/// Services a generation request needs.
#[derive(Clone)]
pub struct StudioServices {
    pub generator: Arc<dyn PosterGenerator>,
    pub store: CardStore,
    pub dispatcher: EmailDispatcher,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    image_url: String,
    saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Default)]
struct GenerateForm {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Option<Vec<u8>>,
    sender_name: String,
    recipient_name: String,
    message: String,
}

pub fn router(services: StudioServices) -> Router {
    Router::new()
        .route("/", get(studio_page))
        .route(
            GENERATE_PATH,
            post(handle_generate).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(services)
}

pub async fn studio_page() -> Html<&'static str> {
    Html(STUDIO_HTML)
}

async fn read_form(multipart: &mut Multipart) -> Result<GenerateForm, Response> {
    let mut form = GenerateForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                return Err(json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("failed to read form: {err}"),
                ));
            }
        };
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            form.content_type = field.content_type().map(|value| value.to_string());
            form.file_name = Some(field.file_name().unwrap_or("").to_string());
            match field.bytes().await {
                Ok(data) => form.bytes = Some(data.to_vec()),
                Err(err) => {
                    return Err(json_error(
                        StatusCode::BAD_REQUEST,
                        &format!("failed to read file: {err}"),
                    ));
                }
            }
            continue;
        }
        let value = match field.text().await {
            Ok(value) => value,
            Err(err) => {
                return Err(json_error(
                    StatusCode::BAD_REQUEST,
                    &format!("failed to read field {name}: {err}"),
                ));
            }
        };
        match name.as_str() {
            "fromName" => form.sender_name = value,
            "toName" => form.recipient_name = value,
            "message" => form.message = value,
            _ => {}
        }
    }
    Ok(form)
}

/// Runs the studio generation flow for one uploaded photo.
pub async fn handle_generate(
    State(services): State<StudioServices>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let (Some(file_name), Some(bytes)) = (form.file_name, form.bytes) else {
        return json_error(StatusCode::BAD_REQUEST, "no file uploaded");
    };
    let image = match SourceImage::new(bytes, &file_name, form.content_type.as_deref()) {
        Ok(image) => image,
        Err(err) => return err.into_response(),
    };
    info!(file_name = %image.file_name, mime_type = %image.mime_type, bytes = image.bytes.len(), "generating poster");

    let mut studio = CardStudio::new(
        services.generator.clone(),
        services.store.clone(),
        Arc::new(services.dispatcher.clone()),
    );
    studio.form.sender_name = form.sender_name;
    studio.form.recipient_name = form.recipient_name;
    studio.form.message = form.message;
    studio.select_image(image);

    match studio.generate().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(GenerateResponse {
                image_url: outcome.image_url,
                saved: outcome.saved,
                warning: outcome.warning,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
