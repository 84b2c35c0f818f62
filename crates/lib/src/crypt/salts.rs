//! Compiled-in salt pool mixed into every password hash.
//!
//! Changing any of these strings invalidates every stored hash.

const STATIC_SALTS: &[&str] = &[
    "q7#Lr9vZ!mT2xKp0$Wc8nB4yHs6dFj1g",
    "Ue3^oP5sN9rXa2Ql7Cz&Vb0Mk4Wt8YhJ",
    "g6Fd1Ts$8Hq3Rn0Lx5Zc!Vm7Bp2Kw9Ea",
    "Ny4%Jh8Qt1Gf6Wb3Ps0Xk9Lr2Dm7Cv5E",
    "b0Ck&7Zw2Ms5Hy9Rq4Tn1Vg8Lf3Xp6Jd",
    "Ra9@Ke2Yv6Nt0Gh4Bs8Qw1Pm5Lc7Xj3F",
    "t5Wq*3Lm8Cz1Rk6Hp0Vf9Nb4Gs2Yd7Jx",
    "Hx2!Gm6Tb9Pq3Lv7Rc0Ws4Nk8Yf1Dj5Z",
    "m8Ys$1Vk5Rf9Bq2Hn6Lt0Cx3Pw7Gd4Jz",
    "Dp3#Wn7Qh0Kv4Zs8Mb1Tf5Rg9Lc2Yx6J",
    "k1Rz^9Gf4Xq6Lp2Vn8Hs0Bt3Mw7Cy5Jd",
    "Lc6&Tm0Ys3Hq7Pk1Gv5Rb9Nx2Wf4Zd8J",
];

/// Reduce `offset` to a position inside the pool.
pub fn pool_offset(offset: usize) -> usize {
    offset % STATIC_SALTS.len()
}

/// Return the salt at `offset`, wrapping around the pool.
pub fn static_salt(offset: usize) -> &'static str {
    STATIC_SALTS[offset % STATIC_SALTS.len()]
}
