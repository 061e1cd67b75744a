mod harness;

mod autotune;
mod firing;
mod interlocks;
mod persistence;
