use state_machines::state_machine;

state_machine! {
    name: AnswerPipelineMachine,
    state: AnswerPipelineState,
    initial: Ready,
    states: [Ready, CacheChecked, Merged, Enhanced, Completed, Failed],
    events {
        check_cache { transition: { from: Ready, to: CacheChecked } }
        serve_cached { transition: { from: CacheChecked, to: Completed } }
        merge { transition: { from: CacheChecked, to: Merged } }
        enhance { transition: { from: Merged, to: Enhanced } }
        finalize {
            transition: { from: Merged, to: Completed }
            transition: { from: Enhanced, to: Completed }
        }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: CacheChecked, to: Failed }
            transition: { from: Merged, to: Failed }
        }
    }
}

pub fn ready() -> AnswerPipelineMachine<(), Ready> {
    AnswerPipelineMachine::new(())
}
