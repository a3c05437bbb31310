mod congestion;
mod network_integration;
mod packet;
mod queues;
mod setup;
mod sim_time;
