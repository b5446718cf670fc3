use crate::{BatchState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: BatchState, msg: Msg) -> (BatchState, Vec<Effect>) {
    let effects = match msg {
        Msg::AssetDiscovered(result) => {
            if state.record(result) {
                vec![Effect::RecycleSession]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}
