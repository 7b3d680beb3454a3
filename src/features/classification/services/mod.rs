mod classifier_gateway;

pub use classifier_gateway::ClassifierGateway;
