pub mod jasmin;
