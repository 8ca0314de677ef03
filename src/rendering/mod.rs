//! Banquet event order document rendering.

use crate::entities::{beo, customer, event, order, schedule, venue};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// An image embedded directly in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    pub name: String,
    pub data_uri: String,
}

impl InlineImage {
    /// Builds a `data:` URI, guessing the mime type from the file name
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Self {
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        Self {
            name: name.to_string(),
            data_uri: format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BeoSection {
    pub beo: beo::Model,
    pub department_name: String,
    pub pic_name: Option<String>,
    pub package_name: Option<String>,
    pub images: Vec<InlineImage>,
}

/// Everything a renderer needs, with attachment bytes already resolved
#[derive(Debug, Clone, Serialize)]
pub struct BeoDocumentContext {
    pub file_code: String,
    pub generated_at: DateTime<Utc>,
    pub approved_by: String,
    pub order: order::Model,
    pub event: event::Model,
    pub customer: customer::Model,
    pub venues: Vec<venue::Model>,
    pub schedules: Vec<schedule::Model>,
    pub sections: Vec<BeoSection>,
    pub order_images: Vec<InlineImage>,
    pub header_images: Vec<InlineImage>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub extension: &'static str,
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, context: &BeoDocumentContext) -> Result<RenderedDocument, RenderError>;
}

/// Renders a self-contained HTML document
#[derive(Debug, Clone, Default)]
pub struct HtmlDocumentRenderer;

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn push_images(html: &mut String, images: &[InlineImage]) -> std::fmt::Result {
    for image in images {
        write!(
            html,
            "<img src=\"{}\" alt=\"{}\"/>",
            image.data_uri,
            escape_html(&image.name)
        )?;
    }
    Ok(())
}

impl HtmlDocumentRenderer {
    pub fn render_html(&self, ctx: &BeoDocumentContext) -> Result<String, std::fmt::Error> {
        let order = &ctx.order;
        let mut html = String::new();

        write!(
            html,
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>",
            escape_html(&ctx.file_code)
        )?;
        html.push_str("<header>");
        push_images(&mut html, &ctx.header_images)?;
        write!(
            html,
            "<h1>Banquet Event Order</h1><p class=\"file-code\">{}</p></header>",
            escape_html(&ctx.file_code)
        )?;

        write!(
            html,
            "<section class=\"order\"><table>\
             <tr><th>Order</th><td>{}</td></tr>\
             <tr><th>Event</th><td>{} ({})</td></tr>\
             <tr><th>Dates</th><td>{} to {}</td></tr>\
             <tr><th>Organizer</th><td>{}</td></tr>\
             <tr><th>Contact</th><td>{} / {} / {}</td></tr>",
            escape_html(&order.custom_code),
            escape_html(&order.event_name),
            escape_html(&ctx.event.event_type),
            order.start_date.format("%d %b %Y"),
            order.end_date.format("%d %b %Y"),
            escape_html(&ctx.customer.organizer),
            escape_html(&ctx.customer.contact_person),
            escape_html(&ctx.customer.phone),
            escape_html(&ctx.customer.email),
        )?;
        if let Some(discount) = order.discount {
            write!(html, "<tr><th>Discount</th><td>{}%</td></tr>", discount)?;
        }
        let venues = ctx
            .venues
            .iter()
            .map(|v| escape_html(&v.name))
            .collect::<Vec<_>>()
            .join(", ");
        write!(html, "<tr><th>Venues</th><td>{}</td></tr></table></section>", venues)?;

        html.push_str("<section class=\"schedules\"><h2>Schedule</h2><table>");
        html.push_str("<tr><th>Function</th><th>Dates</th><th>Time</th><th>People</th></tr>");
        for s in &ctx.schedules {
            write!(
                html,
                "<tr><td>{}</td><td>{} to {}</td><td>{} to {}</td><td>{}</td></tr>",
                s.function,
                s.start_date.format("%d %b %Y"),
                s.end_date.format("%d %b %Y"),
                s.time_start.format("%H:%M"),
                s.time_end.format("%H:%M"),
                s.people
            )?;
        }
        html.push_str("</table></section>");

        for section in &ctx.sections {
            write!(
                html,
                "<section class=\"beo\"><h2>{}</h2>",
                escape_html(&section.department_name)
            )?;
            if let Some(pic) = &section.pic_name {
                write!(html, "<p>PIC: {}</p>", escape_html(pic))?;
            }
            if let Some(package) = &section.package_name {
                write!(html, "<p>Package: {}</p>", escape_html(package))?;
            }
            if let Some(notes) = &section.beo.notes {
                write!(html, "<div class=\"notes\">{}</div>", escape_html(notes))?;
            }
            push_images(&mut html, &section.images)?;
            html.push_str("</section>");
        }

        if !ctx.order_images.is_empty() {
            html.push_str("<section class=\"attachments\"><h2>Attachments</h2>");
            push_images(&mut html, &ctx.order_images)?;
            html.push_str("</section>");
        }

        write!(
            html,
            "<footer>Approved by {} on {}</footer></body></html>",
            escape_html(&ctx.approved_by),
            ctx.generated_at.format("%d %b %Y %H:%M UTC")
        )?;
        Ok(html)
    }
}

#[async_trait]
impl DocumentRenderer for HtmlDocumentRenderer {
    async fn render(&self, context: &BeoDocumentContext) -> Result<RenderedDocument, RenderError> {
        let html = self
            .render_html(context)
            .map_err(|e| RenderError::Template(e.to_string()))?;
        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            mime_type: "text/html".to_string(),
            extension: "html",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::{BeoStatus, OrderStatus};
    use crate::entities::schedule::ScheduleFunction;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn context() -> BeoDocumentContext {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let date = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        BeoDocumentContext {
            file_code: "BEO-001/PPKGBK/JICC/03/2025".into(),
            generated_at: now,
            approved_by: "Kartika".into(),
            order: order::Model {
                id: 1,
                custom_code: "CNF00001".into(),
                event_id: 1,
                event_name: "Tech <Summit>".into(),
                start_date: date(10),
                end_date: date(12),
                status: OrderStatus::Confirmed,
                status_beo: BeoStatus::SentToReview,
                customer_id: 1,
                discount: Some(10.0),
                notes: None,
                created_by: Some(1),
                created_at: now,
                updated_at: None,
                deleted_at: None,
            },
            event: event::Model {
                id: 1,
                event_type: "conference".into(),
                code: "CNF".into(),
                created_at: now,
            },
            customer: customer::Model {
                id: 1,
                organizer: "Acme & Co".into(),
                contact_person: "Budi".into(),
                phone: "0812".into(),
                email: "budi@acme.test".into(),
                address: None,
                kl_status: false,
                created_at: now,
            },
            venues: vec![],
            schedules: vec![schedule::Model {
                id: 1,
                order_id: 1,
                start_date: date(10),
                end_date: date(10),
                time_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                time_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                function: ScheduleFunction::LoadingIn,
                people: 20,
            }],
            sections: vec![],
            order_images: vec![],
            header_images: vec![InlineImage::from_bytes("logo.png", b"\x89PNG")],
        }
    }

    #[tokio::test]
    async fn renders_escaped_self_contained_html() {
        let doc = HtmlDocumentRenderer.render(&context()).await.unwrap();
        assert_eq!(doc.mime_type, "text/html");
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(html.contains("BEO-001/PPKGBK/JICC/03/2025"));
        assert!(html.contains("Tech &lt;Summit&gt;"));
        assert!(html.contains("Acme &amp; Co"));
        assert!(html.contains("Loading In"));
        assert!(html.contains("src=\"data:image/png;base64,"));
        assert!(html.contains("10%"));
    }

    #[test]
    fn inline_image_falls_back_to_octet_stream() {
        let img = InlineImage::from_bytes("blob", b"abc");
        assert_eq!(img.data_uri, "data:application/octet-stream;base64,YWJj");
    }
}
