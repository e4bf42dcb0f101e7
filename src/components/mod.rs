// Export components
pub mod calendar;
pub mod generator;
pub mod planner;
pub mod store;

// Re-export the planner handle
pub use planner::PlannerHandle;
