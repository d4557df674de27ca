//! 扇出 / 汇合：同时启动多个独立任务，全部结束后再继续
//!
//! 不做短路，也不做跨分支取消：某个分支失败时，其余分支照常运行到结束，
//! 调用方拿到每个分支各自的 Result 再决定如何汇总。

use std::future::Future;

use futures_util::future::join;

/// 单个分支的结算结果
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T, E> {
    Ok(T),
    Err(E),
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Settled::Ok(v),
            Err(e) => Settled::Err(e),
        }
    }
}

impl<T, E> Settled<T, E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Settled::Ok(_))
    }
}

/// 两个异构分支并发执行，二者均结束后返回
pub async fn join_settled<A, B, TA, TB, E>(a: A, b: B) -> (Settled<TA, E>, Settled<TB, E>)
where
    A: Future<Output = Result<TA, E>>,
    B: Future<Output = Result<TB, E>>,
{
    let (ra, rb) = join(a, b).await;
    (ra.into(), rb.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failure_does_not_cancel_sibling() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let failing = async { Err::<u32, String>("boom".to_string()) };
        let slow = async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<&str, String>("slow done")
        };

        let (a, b) = join_settled(failing, slow).await;
        assert_eq!(a, Settled::Err("boom".to_string()));
        assert_eq!(b, Settled::Ok("slow done"));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let start = tokio::time::Instant::now();
        let branch = |ms: u64| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<u64, ()>(ms)
        };
        let (a, b) = join_settled(branch(100), branch(100)).await;
        assert!(a.is_ok() && b.is_ok());
        assert!(start.elapsed() < Duration::from_millis(190));
    }
}
