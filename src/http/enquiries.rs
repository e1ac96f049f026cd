//! Enquiry handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::domain::enquiry::{Enquiry, EnquiryMessage, MessageChannel, MessageSender};
use crate::error::Result;
use crate::funnel::{EnquiryDetail, SubmitRequest};
use crate::http::AppState;
use crate::outbound::build_deep_link;
use crate::store::enquiries::EnquiryMetaPatch;

#[derive(Serialize)]
struct EnquiryBody {
    success: bool,
    enquiry: Enquiry,
}

pub async fn create_enquiry(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Response> {
    let (enquiry, items, customer) = state.funnel.submit(request).await?;
    tracing::info!(
        public_id = %enquiry.public_id,
        items = items.len(),
        kind = Enquiry::enquiry_type(items.len()),
        "enquiry received"
    );
    if let Some(phone) = customer.phone.as_deref() {
        let name = Some(customer.name.clone()).filter(|n| !n.is_empty());
        if let Err(e) = state.leads.set(phone, name, enquiry.user_type) {
            tracing::warn!(error = %e, "could not save lead profile");
        }
    }
    if !state.public_channel.is_empty() {
        let text = format!("Enquiry {}", enquiry.public_id);
        let link = build_deep_link(&state.public_channel, &text);
        tracing::info!(%link, "channel handoff link");
    }
    Ok((StatusCode::CREATED, Json(EnquiryBody { success: true, enquiry })).into_response())
}

#[derive(Serialize)]
struct DetailBody {
    success: bool,
    #[serde(flatten)]
    detail: EnquiryDetail,
}

pub async fn get_enquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let detail = state.funnel.read(&id).await?;
    Ok(Json(DetailBody { success: true, detail }).into_response())
}

pub async fn update_enquiry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EnquiryMetaPatch>,
) -> Result<Response> {
    let enquiry = state.funnel.update_meta(&id, patch).await?;
    Ok(Json(EnquiryBody { success: true, enquiry }).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub sender: MessageSender,
    pub channel: MessageChannel,
    pub message: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Serialize)]
struct MessageBody {
    success: bool,
    message: EnquiryMessage,
}

pub async fn append_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Response> {
    let message = state
        .funnel
        .append_message(&id, request.sender, request.channel, &request.message, request.created_by)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageBody { success: true, message })).into_response())
}
