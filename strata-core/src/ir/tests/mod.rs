mod client;
mod registry;
