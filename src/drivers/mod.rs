pub mod sixaxis;
