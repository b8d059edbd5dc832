pub mod alert;
pub mod itinerary;
pub mod profile;
pub mod request;
