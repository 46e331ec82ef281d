pub mod stack;

mod axes_draw;
