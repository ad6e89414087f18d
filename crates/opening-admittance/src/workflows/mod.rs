pub mod admittance;
pub mod registrations;
