//! Shared primitive types used across the engine.

/// A stable, unique identifier for a staff member on the roster.
pub type UserId = String;

/// Identifier of a committed assignment, e.g. `ASSIGN_20250301_093000_u42_1a2b3c4d`.
pub type AssignmentId = String;
