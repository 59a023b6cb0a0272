use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_gate::Gate;

fn main() {
   let counter = Arc::new(AtomicUsize::new(0));
   let gate = {
      let counter = Arc::clone(&counter);
      Arc::new(Gate::<std::io::Error>::new(move || {
         // This closure runs only once
         counter.fetch_add(1, Ordering::Relaxed);
         println!("Initializing...");
         std::thread::sleep(std::time::Duration::from_millis(50));
         Ok(())
      }))
   };

   let threads: Vec<_> = (0..5)
      .map(|i| {
         let gate = Arc::clone(&gate);
         std::thread::spawn(move || {
            gate.init().unwrap();
            println!("Thread {i} passed the gate");
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert!(gate.is_initialized());
   assert_eq!(counter.load(Ordering::Relaxed), 1); // Initializer ran only once

   gate.dispose();
   println!("After dispose: {:?}", gate.init());
}
