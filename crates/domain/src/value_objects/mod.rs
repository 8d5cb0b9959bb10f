pub mod address;
pub mod due_date;
