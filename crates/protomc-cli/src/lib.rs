//! Demo protocols for the protomc model checker, plus the command-line
//! surface shared by their binaries.

pub mod ack;
pub mod fanin;
pub mod opts;
pub mod paxos;
pub mod replication;
