//! Greeting-card HTML templating.
//!
//! The base document marks four regions: two bracketed name tokens and two
//! comment-delimited blocks. [`CardTemplate::parse`] splits the document into
//! literal text and named slots once; [`CardTemplate::render`] fills the slots.
//! Block markers are consumed by rendering, so the output is a finished
//! document and not a template.

use std::sync::LazyLock;

use crate::email::Attachment;
use crate::error::Result;
use crate::image_processing::{decode_data_uri_payload, is_image_data_uri};

const BUNDLED_TEMPLATE: &str = include_str!("../templates/card.html");

pub const RECIPIENT_TOKEN: &str = "[Recipient Name]";
pub const SENDER_TOKEN: &str = "[Sender Name]";
pub const IMAGE_START: &str = "<!-- IMAGE_START -->";
pub const IMAGE_END: &str = "<!-- IMAGE_END -->";
pub const MESSAGE_START: &str = "<!-- MESSAGE_START -->";
pub const MESSAGE_END: &str = "<!-- MESSAGE_END -->";

pub const CARD_IMAGE_FILENAME: &str = "card.png";
pub const CARD_IMAGE_CID: &str = "card-image";

static BUNDLED: LazyLock<CardTemplate> = LazyLock::new(|| CardTemplate::parse(BUNDLED_TEMPLATE));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    RecipientName,
    SenderName,
    Image,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Slot),
}

#[derive(Debug, Clone)]
pub struct CardTemplate {
    segments: Vec<Segment>,
}

/// Values substituted into a [`CardTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct CardContent<'a> {
    pub recipient_name: &'a str,
    pub sender_name: &'a str,
    pub message: &'a str,
    /// A data URI or a remote URL.
    pub image_source: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCard {
    pub html: String,
    pub attachments: Vec<Attachment>,
}

impl CardTemplate {
    pub fn bundled() -> &'static CardTemplate {
        &BUNDLED
    }

    pub fn parse(html: &str) -> Self {
        let mut segments = vec![Segment::Text(html.to_string())];
        carve_block(&mut segments, IMAGE_START, IMAGE_END, Slot::Image);
        carve_block(&mut segments, MESSAGE_START, MESSAGE_END, Slot::Message);
        carve_token(&mut segments, RECIPIENT_TOKEN, Slot::RecipientName);
        carve_token(&mut segments, SENDER_TOKEN, Slot::SenderName);
        Self { segments }
    }

    pub fn slot_count(&self, slot: Slot) -> usize {
        self.segments
            .iter()
            .filter(|segment| **segment == Segment::Slot(slot))
            .count()
    }

    pub fn render(&self, content: &CardContent<'_>) -> Result<RenderedCard> {
        let mut attachments = Vec::new();
        let image_src = if is_image_data_uri(content.image_source) {
            attachments.push(Attachment {
                filename: CARD_IMAGE_FILENAME.to_string(),
                content: decode_data_uri_payload(content.image_source)?,
                content_id: Some(CARD_IMAGE_CID.to_string()),
            });
            format!("cid:{CARD_IMAGE_CID}")
        } else {
            content.image_source.to_string()
        };

        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => html.push_str(text),
                Segment::Slot(Slot::RecipientName) => html.push_str(content.recipient_name),
                Segment::Slot(Slot::SenderName) => html.push_str(content.sender_name),
                Segment::Slot(Slot::Image) => html.push_str(&image_fragment(&image_src)),
                Segment::Slot(Slot::Message) => html.push_str(&message_fragment(content.message)),
            }
        }

        Ok(RenderedCard { html, attachments })
    }
}

/// Replaces the first `start ... end` span (shortest match) found inside a
/// text segment with `slot`.
fn carve_block(segments: &mut Vec<Segment>, start: &str, end: &str, slot: Slot) {
    for index in 0..segments.len() {
        let Segment::Text(text) = &segments[index] else {
            continue;
        };
        let Some(open) = text.find(start) else {
            continue;
        };
        let Some(close) = text[open + start.len()..].find(end) else {
            continue;
        };
        let close = open + start.len() + close + end.len();
        let before = text[..open].to_string();
        let after = text[close..].to_string();
        segments.splice(
            index..=index,
            [
                Segment::Text(before),
                Segment::Slot(slot),
                Segment::Text(after),
            ],
        );
        return;
    }
}

fn carve_token(segments: &mut Vec<Segment>, token: &str, slot: Slot) {
    let mut carved = Vec::with_capacity(segments.len());
    for segment in segments.drain(..) {
        match segment {
            Segment::Text(text) => {
                let mut pieces = text.split(token);
                if let Some(first) = pieces.next() {
                    carved.push(Segment::Text(first.to_string()));
                }
                for piece in pieces {
                    carved.push(Segment::Slot(slot));
                    carved.push(Segment::Text(piece.to_string()));
                }
            }
            other => carved.push(other),
        }
    }
    *segments = carved;
}

fn image_fragment(src: &str) -> String {
    format!(
        r#"
            <div class="image-frame" style="padding: 0; background: none; border: 3px double #1C4E4F; border-radius: 16px; overflow: hidden;">
                <img src="{src}" alt="Vintage Card" style="width: 100%; height: auto; display: block; border-radius: 14px;" />
            </div>
        "#
    )
}

fn message_fragment(message: &str) -> String {
    let body = message.replace('\n', "<br/>");
    format!(
        r#"
            <div class="lines-container" style="background-color: rgba(249, 249, 249, 0.6); border-radius: 8px; padding: 15px; margin-top: 10px;">
                <div style="font-family: 'Handwritten', cursive; font-size: 18px; font-weight: 600; color: #1C4E4F; line-height: 1.6; text-align: center; text-shadow: 1px 1px 0px rgba(232, 220, 202, 0.5);">
                    {body}
                </div>
            </div>
        "#
    )
}
