pub mod fiber_background;
