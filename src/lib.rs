pub mod net;
pub mod proto;
pub mod queue;
pub mod report;
pub mod routing;
pub mod setup;
pub mod sim;
pub mod track;

#[cfg(test)]
mod test;
