// Queue Listener Infrastructure - AWS SQS
// Implements: QueueTransport

pub mod sqs_transport;

pub use sqs_transport::SqsTransport;
