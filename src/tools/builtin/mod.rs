pub mod calendar;
pub mod gmail;
pub mod whatsapp;

pub use calendar::{
    calendar_descriptor, CalendarEvent, CalendarSource, CalendarTool, EventTime, CALENDAR,
};
pub use gmail::{gmail_descriptor, GmailTool, MailMessage, MailSource, GMAIL};
pub use whatsapp::{
    order_confirmation_descriptor, reminder_descriptor, OrderConfirmationTool, ReminderTool,
    ORDER_CONFIRMATION, REMINDER,
};
