mod blood_request;
mod common;
mod routing;
