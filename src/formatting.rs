// src/formatting.rs

use crate::core::Appointment;

/// A trait for rendering an appointment into alert text.
pub trait MessageFormatter: Send + Sync {
    fn format(&self, appointment: &Appointment) -> String;
}

/// A plain, line-per-field formatter suitable for e-mail and chat channels.
pub struct PlainTextFormatter;

impl MessageFormatter for PlainTextFormatter {
    fn format(&self, appointment: &Appointment) -> String {
        let slots = if appointment.slots.is_empty() {
            "Not listed".to_string()
        } else {
            appointment.slots.join(", ")
        };

        format!(
            "An appointment is available at the following center:\n\
             Center Name: {}\n\
             Center Address: {}\n\
             District: {}, {} - {}\n\
             Date: {}\n\
             From: {}\n\
             To: {}\n\
             Fee: {}\n\
             Vaccine: {}\n\
             Available Capacity: {}\n\
             Minimum Age: {}\n\
             Slots: {}",
            appointment.center_name,
            appointment.address,
            appointment.district,
            appointment.state,
            appointment.pincode,
            appointment.date,
            appointment.from,
            appointment.to,
            appointment.fee,
            appointment.vaccine,
            appointment.available_capacity,
            age_group(appointment),
            slots,
        )
    }
}

fn age_group(appointment: &Appointment) -> &'static str {
    match (appointment.min_age_18, appointment.min_age_45) {
        (true, _) => "18+",
        (false, true) => "45+",
        (false, false) if appointment.for_all => "All ages",
        _ => "Unknown",
    }
}
