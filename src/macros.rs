/**********************************************
  > File Name		: macros.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Fri 14 May 2021 10:34:16 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Map a foreign error into one of our own error variants.
 * The source error is only logged, the caller gets the variant.
 */
#[macro_export]
macro_rules! ok_or_return {
    ($func: expr, $Error: ident::$err: ident) => {{
        match $func {
            Ok(v) => v,
            Err(e) => {
                log::debug!("{} failed: {:?}", stringify!($func), e);
                return Err($Error::$err);
            }
        }
    }};
}

#[macro_export]
macro_rules! error_return {
    ($func: expr, $Error: ident::$err: ident) => {
        if let Err(e) = $func {
            log::debug!("{} failed: {:?}", stringify!($func), e);
            return Err($Error::$err);
        }
    }
}
