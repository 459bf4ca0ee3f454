pub mod calendar;
pub mod supabase;
