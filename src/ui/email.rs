use eframe::egui::{self, Color32, RichText, Ui};

use crate::mailer::{OutcomeKind, SmtpMailer};
use crate::session::Session;

/// Recipient / sender / password form and the send button.
pub fn email_form(ui: &mut Ui, session: &mut Session) {
    ui.heading("Send report by e-mail");

    egui::Grid::new("email_form")
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui: &mut Ui| {
            ui.label("Recipient e-mail");
            ui.text_edit_singleline(&mut session.email.recipient);
            ui.end_row();

            ui.label("Your e-mail (sender)");
            ui.text_edit_singleline(&mut session.email.sender);
            ui.end_row();

            ui.label("E-mail password");
            ui.add(egui::TextEdit::singleline(&mut session.email.password).password(true));
            ui.end_row();
        });

    if ui.button("Send report").clicked() {
        let mailer = SmtpMailer::new(session.config.smtp_host.clone(), session.config.smtp_port);
        session.send_email(&mailer);
    }

    if let Some(outcome) = &session.mail_outcome {
        let color = match outcome.kind {
            OutcomeKind::Sent => Color32::LIGHT_GREEN,
            OutcomeKind::Failed => Color32::RED,
            OutcomeKind::Incomplete => Color32::YELLOW,
        };
        ui.label(RichText::new(&outcome.message).color(color));
    }
}
