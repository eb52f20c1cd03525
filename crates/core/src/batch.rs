//! All-settled fan-out

use futures_util::future::join_all;
use std::future::Future;

/// Outcomes of a batch, partitioned and kept in input order
#[derive(Debug)]
pub struct Settled<T, E> {
    pub successes: Vec<T>,
    pub failures: Vec<E>,
}

impl<T, E> Settled<T, E> {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// Drive every future to completion concurrently. One failure never cancels
/// its siblings.
pub async fn settle_all<I, Fut, T, E>(futures: I) -> Settled<T, E>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
{
    let mut settled = Settled {
        successes: Vec::new(),
        failures: Vec::new(),
    };

    for outcome in join_all(futures).await {
        match outcome {
            Ok(value) => settled.successes.push(value),
            Err(e) => settled.failures.push(e),
        }
    }

    settled
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_partitions_in_input_order() {
        let jobs = (1..=5u64).map(|n| async move {
            // later jobs finish first
            tokio::time::sleep(Duration::from_millis(100 - n * 10)).await;
            if n % 2 == 0 {
                Err(format!("job {} failed", n))
            } else {
                Ok(n)
            }
        });

        let settled = settle_all(jobs).await;

        assert_eq!(settled.successes, vec![1, 3, 5]);
        assert_eq!(settled.failures, vec!["job 2 failed", "job 4 failed"]);
        assert_eq!(settled.total(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let settled: Settled<u8, String> =
            settle_all(Vec::<std::future::Ready<Result<u8, String>>>::new()).await;
        assert_eq!(settled.total(), 0);
    }
}
