pub mod depot;
pub mod echelon;
pub mod inventory;
pub mod issuing;
pub mod queues;
pub mod retailer;
