use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_gate::{CancelToken, Gate};
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() {
   let counter = Arc::new(AtomicUsize::new(0));
   let gate = {
      let counter = Arc::clone(&counter);
      Arc::new(Gate::<&'static str>::with_cancel_async(move |token: CancelToken| {
         let counter = Arc::clone(&counter);
         async move {
            // This async block runs only once
            counter.fetch_add(1, Ordering::Relaxed);
            println!("Initializing asynchronously...");
            tokio::select! {
               () = sleep(Duration::from_millis(50)) => Ok(()),
               () = token.cancelled() => Err("initialization cancelled"),
            }
         }
      }))
   };

   let tasks: Vec<_> = (0..5)
      .map(|i| {
         let gate = Arc::clone(&gate);
         tokio::spawn(async move {
            gate.init_async().await.unwrap();
            println!("Task {i} passed the gate");
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert!(gate.is_initialized());
   assert_eq!(counter.load(Ordering::Relaxed), 1); // Initializer ran only once
   gate.dispose_async().await;
   println!("Disposed: {:?}", gate);
}
