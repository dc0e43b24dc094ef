/// Input events and stream payload mapping.
pub mod events;
/// Thread aggregate and the reply stream state machine.
pub mod message;
pub mod message_input;
pub mod message_list;
pub mod thread;

pub use events::{Stop, Submit, stream_transition};
pub use message::{
    Message, MessageId, MessageStatus, StreamState, StreamTransition, StreamTransitionRejection,
    StreamTransitionResult, Thread,
};
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use thread::ThreadView;
