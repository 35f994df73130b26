use std::thread;
use std::sync::mpsc;
use std::sync::{ Arc, Mutex };

use log::{ debug, warn };

use crate::scene::{ Scene, SceneHit };

pub enum Message {
    /// Intersect the ray with this index against every curve.
    Query(usize),
    Terminate,
}

type QueryResult = (usize, Option<SceneHit>);

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, scene: Arc<Scene>,
        receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
        results: mpsc::Sender<QueryResult>) -> Worker {

        let thread = thread::spawn(move || loop {
            // The lock is released as soon as a message has been taken.
            let message = match receiver.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => break,
            };

            match message {
                Ok(Message::Query(index)) => {
                    let ray = scene.rays[index];
                    let hit = scene.closest_hit(&ray, scene.max_distance);

                    if results.send((index, hit)).is_err() {
                        break;
                    }
                },

                // Exit the worker thread loop, terminating the thread.
                Ok(Message::Terminate) | Err(_) => break,
            }
        });

        Worker { id, thread: Some(thread) }
    }
}

/// A fixed set of threads answering ray queries against a shared scene.
///
/// Curves are immutable, so workers read the scene concurrently without
/// locking it; only the job queue sits behind a mutex.
pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: mpsc::Sender<Message>,
}

impl ThreadPool {
    pub fn new(size: usize, scene: Arc<Scene>,
        results: mpsc::Sender<QueryResult>) -> ThreadPool {
        // There should be at least one thread to run workers.
        assert!(size > 0);

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| Worker::new(
                id,
                Arc::clone(&scene),
                Arc::clone(&receiver),
                results.clone()
            ))
            .collect();

        ThreadPool { workers, sender }
    }

    /// Queues a message; returns `false` if every worker has already exited.
    pub fn execute(&self, message: Message) -> bool {
        self.sender.send(message).is_ok()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Terminate);
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!("worker {} panicked", worker.id);
                }
            }
        }
    }
}

/// Runs every ray of `scene` on `threads` workers.
///
/// The result vector is in ray order and holds the closest hit of each ray,
/// if any.
pub fn run_batch(scene: Arc<Scene>, threads: usize) -> Vec<Option<SceneHit>> {
    let threads = threads.max(1);
    let ray_count = scene.rays.len();
    let (result_sender, result_receiver) = mpsc::channel();

    debug!("intersecting {} rays with {} curves on {} threads",
        ray_count, scene.curves.len(), threads);

    {
        let pool = ThreadPool::new(threads, scene, result_sender);

        for index in 0..ray_count {
            if !pool.execute(Message::Query(index)) {
                warn!("no workers left; ray {} and later were not traced", index);
                break;
            }
        }
    }

    // Every sender is gone once the pool has joined its workers.
    let mut hits = vec![None; ray_count];
    for (index, hit) in result_receiver.iter() {
        hits[index] = hit;
    }

    debug!("{} of {} rays hit a curve",
        hits.iter().filter(|h| h.is_some()).count(), ray_count);

    hits
}

#[cfg(test)]
use crate::curve::BezierCurve3;
#[cfg(test)]
use crate::ray::Ray3;
#[cfg(test)]
use crate::tuple::Vector3;

#[test]
fn batch_matches_sequential_queries() {
    let curve = BezierCurve3::new([
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 1.0, 5.0),
        Vector3::new(2.0, -1.0, 5.0),
        Vector3::new(3.0, 0.0, 5.0),
    ], 0.2);

    let mut scene = Scene::new(vec![curve.into()]);
    scene.rays = (0..40)
        .map(|i| Ray3::new(
            Vector3::new(i as f64 * 0.1 - 0.5, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0)
        ))
        .collect();

    let expected: Vec<_> = scene.rays.iter()
        .map(|r| scene.closest_hit(r, scene.max_distance))
        .collect();

    let hits = run_batch(Arc::new(scene), 4);

    assert_eq!(hits, expected);
    assert!(hits.iter().any(|h| h.is_some()));
    assert!(hits.iter().any(|h| h.is_none()));
}

#[test]
fn empty_batch() {
    let scene = Scene::new(Vec::new());
    assert!(run_batch(Arc::new(scene), 0).is_empty());
}
