use goldspin_core::{MachineParams, SeededStream, SlotMachine, TracingNotifier};

fn main() {
    // Example end-to-end spin on a virtual clock
    let rng = SeededStream::new("example-seed");
    let seed_hash = rng.seed_hash_hex();
    let mut machine = SlotMachine::new(MachineParams::classic(), rng, TracingNotifier)
        .expect("classic params are valid");
    machine.spin();
    while let Some(due) = machine.next_deadline() {
        machine.advance_to(due);
        let line: Vec<String> = machine
            .reels()
            .iter()
            .map(|r| format!("{}:{}", r.phase(), r.visible()[1]))
            .collect();
        if due % 250 == 0 {
            println!("t={due:>5}ms {}", line.join("  "));
        }
    }
    let view = machine.view();
    println!(
        "seed_hash={} line={:?} win={} balance={}",
        seed_hash,
        view.centre_line(),
        view.win,
        view.balance
    );
}
