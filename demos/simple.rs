use tracing_subscriber::{fmt, EnvFilter};
use typebus::{Receiver, Subscription};

typebus::declare! {
    struct Update {
        delta_time: f32,
    }

    struct Draw;
}

impl From<f32> for Update {
    fn from(delta_time: f32) -> Self {
        Self { delta_time }
    }
}

struct Handler {
    name: String,
}

impl Handler {
    fn handle(&self, event: &Update) {
        println!("Receive Update in handler {}: {}", self.name, event.delta_time);
    }
}

impl Receiver<Update> for Handler {
    fn receive(&mut self, event: &Update) {
        self.handle(event)
    }
}

fn print_delta(event: &Update) {
    println!("Receive Update in function: {}", event.delta_time);
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn main() {
    init_logging();

    typebus::receive(print_delta);
    typebus::receive_with::<Update, _>(Handler {
        name: "Test Handler".to_owned(),
    });
    Update::receive(|event| println!("Receive Update in closure: {}", event.delta_time));

    println!("\n-- Local payload:");
    Update { delta_time: 5.0 }.send().expect("Update sent recursively");

    println!("\n-- Built from arguments:");
    typebus::send_from::<Update, _>(0.5).expect("Update sent recursively");

    println!("\n-- Subscription management:");
    let mut subscription = Subscription::<Draw>::default();
    println!("Is valid: {}", subscription.is_valid());

    subscription = Draw::receive(|_| println!("Receive Draw"));
    println!("Is valid: {}", subscription.is_valid());

    println!("\n-- Active:");
    Draw.send().expect("Draw sent recursively");

    subscription.pause().expect("Draw receiver paused twice");
    println!("\n-- Paused:");
    Draw.send().expect("Draw sent recursively");

    subscription.resume().expect("Draw receiver resumed twice");
    println!("\n-- Resumed:");
    Draw.send().expect("Draw sent recursively");

    subscription.remove().expect("Draw receiver removed twice");
    println!("\n-- Removed:");
    Draw.send().expect("Draw sent recursively");

    println!("\nIs valid: {}", subscription.is_valid());
    if let Err(error) = subscription.remove() {
        println!("Second remove: {}", error);
    }
}
