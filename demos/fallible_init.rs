use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_gate::Gate;

fn main() {
   let fail = Arc::new(AtomicBool::new(true));
   let gate = {
      let fail = Arc::clone(&fail);
      Gate::new(move || {
         let fail = fail.load(Ordering::Relaxed);
         println!("Attempting initialization (fail={fail})...");
         if fail {
            Err("Initialization failed!")
         } else {
            Ok(())
         }
      })
   };

   // First attempt fails
   match gate.init() {
      Ok(()) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!gate.is_initialized()); // Still uninitialized, not poisoned

   // Second attempt succeeds
   fail.store(false, Ordering::Relaxed);
   gate.init().expect("Should have succeeded");
   assert!(gate.is_initialized());

   // Subsequent attempts never rerun the routine
   fail.store(true, Ordering::Relaxed);
   gate.init().expect("Should stay initialized");
}
