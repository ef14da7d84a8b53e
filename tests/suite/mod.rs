mod branch;
mod cli;
mod fixture;
