use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct GameOverOverlayProps {
    pub score: u32,
    pub high_score: u32,
    pub time_survived: String,
    /// Practice runs do not count toward the high score.
    pub practice: bool,
    pub restart: Callback<()>,
    pub to_menu: Callback<()>,
}

#[function_component]
pub fn GameOverOverlay(props: &GameOverOverlayProps) -> Html {
    let restart_cb = props.restart.clone();
    let restart_btn = Callback::from(move |_| restart_cb.emit(()));
    let menu_btn = {
        let cb = props.to_menu.clone();
        Callback::from(move |_| cb.emit(()))
    };
    let best = if props.practice {
        "Practice run".to_owned()
    } else if props.score >= props.high_score && props.score > 0 {
        "New high score!".to_owned()
    } else {
        format!("High Score: {}", props.high_score)
    };
    html! {
        <div style="position:absolute; top:50%; left:50%; transform:translate(-50%, -50%); background:rgba(0,0,0,0.85); border:2px solid #f85149; padding:24px 32px; border-radius:12px; text-align:center; min-width:320px;">
            <h2 style="margin:0 0 12px 0; color:#f85149;">{"Crashed"}</h2>
            <p style="margin:4px 0; font-size:28px; font-weight:800;">{ props.score }</p>
            <p style="margin:4px 0;">{ best }</p>
            <p style="margin:4px 0;">{ format!("Time Survived: {}", props.time_survived) }</p>
            <div style="margin-top:16px; display:flex; gap:12px; justify-content:center;">
                <button onclick={restart_btn}>{"Run Again"}</button>
                <button onclick={menu_btn}>{"Menu"}</button>
            </div>
        </div>
    }
}
