use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{SchoolConfig, SmtpConfig};

use super::domain::{Applicant, Locale};

/// Delivery failure. The pipeline swallows this during intake and the admin
/// resend surface propagates it.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification compose failed: {0}")]
    Compose(String),
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Outbound confirmation hook so the pipeline can be exercised without a
/// relay. Implementations deliver the localized confirmation with the
/// rendered document attached, blind-copying the administrative mailbox.
pub trait NotificationGateway: Send + Sync {
    fn send_confirmation(
        &self,
        applicant: &Applicant,
        document: &[u8],
    ) -> Result<(), NotificationError>;
}

struct ConfirmationCopy {
    subject: &'static str,
    greeting: &'static str,
    confirmed: &'static str,
    id_label: &'static str,
    course_label: &'static str,
    date_label: &'static str,
    attachment_note: &'static str,
    keep_note: &'static str,
}

fn copy_for(locale: Locale) -> ConfirmationCopy {
    match locale {
        Locale::Fr => ConfirmationCopy {
            subject: "Confirmation d'inscription",
            greeting: "Félicitations",
            confirmed: "Votre inscription a été confirmée avec succès.",
            id_label: "ID de candidature",
            course_label: "Formation",
            date_label: "Date d'inscription",
            attachment_note:
                "Vous trouverez en pièce jointe votre fiche d'inscription officielle au format PDF.",
            keep_note: "Conservez votre ID de candidature pour vos échanges avec l'école.",
        },
        Locale::En => ConfirmationCopy {
            subject: "Enrollment confirmation",
            greeting: "Congratulations",
            confirmed: "Your enrollment has been confirmed.",
            id_label: "Application ID",
            course_label: "Course",
            date_label: "Enrollment date",
            attachment_note: "Your official enrollment sheet is attached as a PDF.",
            keep_note: "Keep your application ID for any exchange with the school.",
        },
        Locale::Ar => ConfirmationCopy {
            subject: "تأكيد التسجيل",
            greeting: "تهانينا",
            confirmed: "تم تأكيد تسجيلكم بنجاح.",
            id_label: "رقم الترشح",
            course_label: "التكوين",
            date_label: "تاريخ التسجيل",
            attachment_note: "تجدون في المرفق استمارة التسجيل الرسمية بصيغة PDF.",
            keep_note: "احتفظوا برقم الترشح لأي تواصل مع المدرسة.",
        },
    }
}

pub(crate) fn confirmation_subject(locale: Locale, school: &SchoolConfig) -> String {
    format!("{} - {}", copy_for(locale).subject, school.name)
}

/// Localized HTML body; right-to-left layout when the stored locale asks for
/// it. Field values are escaped before interpolation.
pub(crate) fn confirmation_html(applicant: &Applicant, school: &SchoolConfig) -> String {
    let copy = copy_for(applicant.locale);
    let direction = if applicant.locale.is_rtl() { "rtl" } else { "ltr" };
    let enrollment_date = applicant.created_at.date_naive().format("%d/%m/%Y");

    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html dir=\"{dir}\" lang=\"{lang}\">\n",
            "<head><meta charset=\"UTF-8\"></head>\n",
            "<body style=\"font-family: Arial, sans-serif; background-color: #f5f5f5; padding: 20px;\">\n",
            "<div style=\"max-width: 600px; margin: 0 auto; background: #ffffff; border-radius: 16px; overflow: hidden;\">\n",
            "<div style=\"background: #0F4C81; color: #ffffff; padding: 30px; text-align: center;\">\n",
            "<h1>{school}</h1>\n",
            "<p>{subject}</p>\n",
            "</div>\n",
            "<div style=\"padding: 30px;\">\n",
            "<h2>{greeting} {name} !</h2>\n",
            "<p>{confirmed}</p>\n",
            "<table style=\"width: 100%; background: #f8f9fa; border-radius: 8px; padding: 12px;\">\n",
            "<tr><td><strong>{id_label}:</strong></td><td>{application_id}</td></tr>\n",
            "<tr><td><strong>{course_label}:</strong></td><td>{course}</td></tr>\n",
            "<tr><td><strong>{date_label}:</strong></td><td>{date}</td></tr>\n",
            "</table>\n",
            "<p>{attachment_note}</p>\n",
            "<p>{keep_note}</p>\n",
            "</div>\n",
            "<div style=\"background: #f8f9fa; padding: 20px; text-align: center; color: #666666; font-size: 14px;\">\n",
            "<p><strong>{school}</strong><br>{address}<br>Tél: {phone} | Email: {email}</p>\n",
            "</div>\n",
            "</div>\n",
            "</body>\n",
            "</html>\n",
        ),
        dir = direction,
        lang = applicant.locale.as_str(),
        school = escape_html(&school.name),
        subject = escape_html(copy.subject),
        greeting = escape_html(copy.greeting),
        name = escape_html(&applicant.full_name),
        confirmed = escape_html(copy.confirmed),
        id_label = escape_html(copy.id_label),
        application_id = escape_html(&applicant.application_id.0),
        course_label = escape_html(copy.course_label),
        course = escape_html(&applicant.course),
        date_label = escape_html(copy.date_label),
        date = enrollment_date,
        attachment_note = escape_html(copy.attachment_note),
        keep_note = escape_html(copy.keep_note),
        address = escape_html(&school.address),
        phone = escape_html(&school.phone),
        email = escape_html(&school.email),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// STARTTLS relay client with a bounded send timeout so a stuck relay cannot
/// hang an enrollment request.
pub struct SmtpNotifier {
    transport: SmtpTransport,
    sender: Mailbox,
    admin: Mailbox,
    school: SchoolConfig,
}

impl SmtpNotifier {
    pub fn from_config(smtp: &SmtpConfig, school: SchoolConfig) -> Result<Self, NotificationError> {
        let mut builder = SmtpTransport::starttls_relay(&smtp.host)
            .map_err(|err| NotificationError::Transport(err.to_string()))?
            .port(smtp.port)
            .timeout(Some(Duration::from_secs(smtp.timeout_secs)));

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let sender = format!("{} <{}>", school.name, smtp.sender)
            .parse::<Mailbox>()
            .map_err(|err| NotificationError::Compose(err.to_string()))?;
        let admin = smtp
            .admin_email
            .parse::<Mailbox>()
            .map_err(|err| NotificationError::Compose(err.to_string()))?;

        Ok(Self {
            transport: builder.build(),
            sender,
            admin,
            school,
        })
    }
}

impl NotificationGateway for SmtpNotifier {
    fn send_confirmation(
        &self,
        applicant: &Applicant,
        document: &[u8],
    ) -> Result<(), NotificationError> {
        let recipient = applicant
            .email
            .parse::<Mailbox>()
            .map_err(|err| NotificationError::Compose(err.to_string()))?;

        let html = confirmation_html(applicant, &self.school);
        let filename = format!("inscription-{}.pdf", applicant.application_id.0);
        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|err| NotificationError::Compose(err.to_string()))?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .bcc(self.admin.clone())
            .subject(confirmation_subject(applicant.locale, &self.school))
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    )
                    .singlepart(Attachment::new(filename).body(document.to_vec(), pdf_type)),
            )
            .map_err(|err| NotificationError::Compose(err.to_string()))?;

        self.transport
            .send(&message)
            .map(|_| ())
            .map_err(|err| NotificationError::Transport(err.to_string()))
    }
}
