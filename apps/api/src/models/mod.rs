pub mod mentee;
