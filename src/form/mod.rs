pub mod requests;

pub use requests::{
    BatchRequest, DateRangeRequest, GenerateRequest, NextTurnRequest, PartitionRequest,
    RandomizeRequest, ReassignRequest, TargetRequest,
};
