// app/src/pipelines/common_steps.rs

//! Notification emails sent once a payment is confirmed. Bodies are built
//! from the processor's own line items, not from the cached order row.

use crate::errors::{AppError, Result as AppResult};
use crate::money::format_eur;
use crate::services::email::{Mailer, OutgoingEmail, SentEmailInfo};
use crate::services::payment::{ChargedLineItem, RetrievedSession};
use tracing::{info, instrument, warn};

fn escape_html(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

pub fn render_line_items(items: &[ChargedLineItem]) -> String {
  let rows: String = items
    .iter()
    .map(|li| {
      format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape_html(&li.description),
        li.quantity,
        format_eur(li.amount_total)
      )
    })
    .collect();
  format!(
    "<table><thead><tr><th>Article</th><th>Qté</th><th>Montant</th></tr></thead><tbody>{}</tbody></table>",
    rows
  )
}

/// Receipt for the buyer. `fallback_email` is used when the processor did
/// not report one.
pub fn customer_receipt(session: &RetrievedSession, fallback_email: Option<&str>) -> AppResult<OutgoingEmail> {
  let to = session
    .customer_email
    .as_deref()
    .or(fallback_email)
    .filter(|e| e.contains('@'))
    .ok_or_else(|| AppError::Email(format!("No customer email for session {}", session.id)))?;
  let name = session.customer_name.as_deref().unwrap_or("cher lecteur");
  Ok(OutgoingEmail {
    to: to.to_string(),
    subject: "Confirmation de votre commande".to_string(),
    html: format!(
      "<p>Bonjour {},</p><p>Merci pour votre commande. Voici le récapitulatif de votre paiement :</p>{}<p><strong>Total : {}</strong></p>",
      escape_html(name),
      render_line_items(&session.line_items),
      format_eur(session.amount_total)
    ),
  })
}

pub fn admin_alert(session: &RetrievedSession, admin_email: &str) -> OutgoingEmail {
  let name = session.customer_name.as_deref().unwrap_or("Client inconnu");
  let email = session.customer_email.as_deref().unwrap_or("-");
  let shipping = session
    .metadata
    .get("shipping_cents")
    .and_then(|c| c.parse::<i64>().ok())
    .unwrap_or(0);
  OutgoingEmail {
    to: admin_email.to_string(),
    subject: format!("Nouvelle commande : {} ({})", name, format_eur(session.amount_total)),
    html: format!(
      "<p>Nouvelle commande payée.</p><ul><li>Client : {} &lt;{}&gt;</li><li>Session : {}</li><li>Mode : {}</li><li>Frais de port : {}</li></ul>{}",
      escape_html(name),
      escape_html(email),
      escape_html(&session.id),
      session.mode.as_str(),
      format_eur(shipping),
      render_line_items(&session.line_items)
    ),
  }
}

/// Admin alert for a charged session that has no order row. The order must
/// be recreated by hand from this message.
pub fn unrecorded_payment_alert(session: &RetrievedSession, admin_email: &str) -> OutgoingEmail {
  let mut alert = admin_alert(session, admin_email);
  alert.subject = format!("[Commande non enregistrée] {}", alert.subject);
  alert.html = format!(
    "<p><strong>Paiement reçu sans commande en base pour la session {}.</strong> À ressaisir manuellement.</p>{}",
    escape_html(&session.id),
    alert.html
  );
  alert
}

#[instrument(name = "common_step::send_email", skip(mailer, email), fields(to = %email.to, subject = %email.subject), err)]
pub async fn send_email_step(mailer: &dyn Mailer, email: &OutgoingEmail) -> AppResult<SentEmailInfo> {
  match mailer.send(email).await {
    Ok(sent) => {
      info!("Email sent successfully. Message ID: {}", sent.message_id);
      Ok(sent)
    }
    Err(e) => {
      warn!("Failed to send email: {:?}", e);
      Err(e)
    }
  }
}
