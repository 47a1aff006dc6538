mod components;

use components::app::App;

fn main() {
    console_log::init_with_level(log::Level::Debug).ok();
    yew::Renderer::<App>::new().render();
}
