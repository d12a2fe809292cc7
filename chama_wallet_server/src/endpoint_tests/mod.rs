mod access;
mod helpers;
mod payments;
mod wallet;
